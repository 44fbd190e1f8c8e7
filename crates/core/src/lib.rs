pub mod logging;

pub mod adaptive;
pub mod cancel;
pub mod downloader;
pub mod fetch_head;
pub mod options;
pub mod orchestrate;
pub mod parse;
pub mod progress;
pub mod recursive;
pub mod retry;
pub mod segmenter;
pub mod storage;
pub mod url_model;
