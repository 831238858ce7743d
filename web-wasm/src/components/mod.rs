//! UIコンポーネント

pub mod diagnosis_panel;
pub mod findings_list;
pub mod header;
pub mod image_uploader;
pub mod image_viewer;
pub mod report_generator;
