pub mod book;
pub mod paging;
pub mod review;
pub mod subscription;

pub use paging::{Page, Paging};
