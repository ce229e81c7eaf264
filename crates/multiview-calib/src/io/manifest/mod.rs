mod poses;
pub use poses::*;

mod transforms;
pub use transforms::*;
