pub(crate) mod ease;
pub(crate) mod timeline;
pub(crate) mod track;
pub(crate) mod value;
