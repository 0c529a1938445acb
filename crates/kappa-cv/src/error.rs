/// Input problems the matcher refuses to correlate.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CvError {
    #[error("{0} image is empty")]
    EmptyImage(&'static str),

    #[error("template {template:?} does not fit inside frame {frame:?}")]
    TemplateTooLarge {
        template: (i32, i32),
        frame: (i32, i32),
    },

    #[error("template has a single intensity and cannot be correlated")]
    FlatTemplate,

    #[error("unsupported channel count {0}")]
    UnsupportedChannels(i32),
}
