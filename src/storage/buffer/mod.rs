mod replacer;

pub use replacer::LruReplacer;
