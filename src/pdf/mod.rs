pub mod builder;
pub mod generator;
pub mod layout;
pub mod qr;
pub mod renderer;

pub use generator::{Asset, PdfCompiler, TypstCompiler};
pub use layout::InvoiceLayout;
pub use renderer::{pdf_key, PdfRenderer};
