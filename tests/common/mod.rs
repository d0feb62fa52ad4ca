#![allow(dead_code)]
#![allow(unused_imports)]

pub mod builders;
pub mod reference;
pub mod strategies;

pub use builders::*;
pub use reference::*;
pub use strategies::*;
