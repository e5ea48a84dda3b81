pub mod cart;
pub mod product;
pub mod order;
pub mod favorite;
pub mod profile;
pub mod address;
pub mod payment;

pub use cart::*;
pub use product::*;
pub use order::*;
pub use favorite::*;
pub use profile::*;
pub use address::*;
pub use payment::*;
