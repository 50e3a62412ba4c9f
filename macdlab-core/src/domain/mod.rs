//! Domain types for macdlab

pub mod bar;
pub mod params;
pub mod position;
pub mod series;
pub mod trade;

pub use bar::{is_valid_price, Bar};
pub use params::ParameterSet;
pub use position::{Position, PositionSide};
pub use series::PriceSeries;
pub use trade::TradeRecord;
