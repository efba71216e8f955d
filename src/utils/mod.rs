mod days;
mod plotting;
mod surface;
mod window;

pub use days::*;
pub use plotting::*;
pub use surface::*;
pub use window::*;
