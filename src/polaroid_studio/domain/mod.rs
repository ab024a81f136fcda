pub mod caption_painter_trait;
pub mod caption_request;
pub mod caption_source_trait;
pub mod caption_upstream_trait;
pub mod error;
pub mod event_stream;
pub mod filter;
pub mod geometry;
pub mod image;
pub mod text_fit;
