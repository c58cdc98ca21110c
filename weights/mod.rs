pub mod table;

pub use table::{WeightError, WeightExport, WeightFormat, WeightTable};
