pub mod load;
pub mod set;
pub mod weights;
