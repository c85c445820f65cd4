pub mod clipboard;
pub mod remote;
pub mod shapes;
pub mod transform;
