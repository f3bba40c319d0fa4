pub type WavecastResult<T> = Result<T, WavecastError>;

/// Fieldless error taxonomy, one entry per [`WavecastError`] variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InputMissing,
    AudioInvalid,
    ConfigInvalid,
    EncodeFailed,
    Stalled,
    ResourceExhausted,
    Cancelled,
    Other,
}

/// What the encoder left behind when a job went wrong.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncoderDiagnostics {
    /// Last (at most 1000) bytes of encoder stderr.
    pub stderr_tail: String,
    /// Frame being written when the failure was detected, if any.
    pub frame_index: Option<u64>,
    /// Output file size at the time of failure.
    pub output_bytes: u64,
}

impl EncoderDiagnostics {
    fn suffix(&self) -> String {
        let mut out = match self.frame_index {
            Some(idx) => format!(" (frame {idx}, output {} bytes)", self.output_bytes),
            None => format!(" (output {} bytes)", self.output_bytes),
        };
        let tail = self.stderr_tail.trim();
        if !tail.is_empty() {
            out.push_str(": ");
            out.push_str(tail);
        }
        out
    }
}

#[derive(thiserror::Error, Debug)]
pub enum WavecastError {
    #[error("input missing: {0}")]
    InputMissing(String),

    #[error("audio invalid: {0}")]
    AudioInvalid(String),

    #[error("config invalid: {0}")]
    ConfigInvalid(String),

    #[error("encode failed: {message}{}", .diagnostics.suffix())]
    EncodeFailed {
        message: String,
        diagnostics: Box<EncoderDiagnostics>,
    },

    #[error("stalled: {message}{}", .diagnostics.suffix())]
    Stalled {
        message: String,
        diagnostics: Box<EncoderDiagnostics>,
    },

    #[error("resource exhausted: {message}{}", .diagnostics.suffix())]
    ResourceExhausted {
        message: String,
        diagnostics: Box<EncoderDiagnostics>,
    },

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WavecastError {
    pub fn input_missing(msg: impl Into<String>) -> Self {
        Self::InputMissing(msg.into())
    }

    pub fn audio_invalid(msg: impl Into<String>) -> Self {
        Self::AudioInvalid(msg.into())
    }

    pub fn config_invalid(msg: impl Into<String>) -> Self {
        Self::ConfigInvalid(msg.into())
    }

    pub fn encode_failed(msg: impl Into<String>) -> Self {
        Self::EncodeFailed {
            message: msg.into(),
            diagnostics: Box::default(),
        }
    }

    pub fn stalled(msg: impl Into<String>) -> Self {
        Self::Stalled {
            message: msg.into(),
            diagnostics: Box::default(),
        }
    }

    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        Self::ResourceExhausted {
            message: msg.into(),
            diagnostics: Box::default(),
        }
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InputMissing(_) => ErrorKind::InputMissing,
            Self::AudioInvalid(_) => ErrorKind::AudioInvalid,
            Self::ConfigInvalid(_) => ErrorKind::ConfigInvalid,
            Self::EncodeFailed { .. } => ErrorKind::EncodeFailed,
            Self::Stalled { .. } => ErrorKind::Stalled,
            Self::ResourceExhausted { .. } => ErrorKind::ResourceExhausted,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::Other(_) => ErrorKind::Other,
        }
    }

    /// Attach encoder diagnostics. Variants that do not carry diagnostics are returned unchanged.
    pub fn with_diagnostics(mut self, diag: EncoderDiagnostics) -> Self {
        match &mut self {
            Self::EncodeFailed { diagnostics, .. }
            | Self::Stalled { diagnostics, .. }
            | Self::ResourceExhausted { diagnostics, .. } => **diagnostics = diag,
            _ => {}
        }
        self
    }

    pub fn diagnostics(&self) -> Option<&EncoderDiagnostics> {
        match self {
            Self::EncodeFailed { diagnostics, .. }
            | Self::Stalled { diagnostics, .. }
            | Self::ResourceExhausted { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
