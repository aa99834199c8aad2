//! Domain types for closefeed

pub mod candle;
pub mod price;

pub use candle::Candle;
pub use price::{PriceKey, PriceRecord};
