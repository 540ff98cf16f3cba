use thiserror::Error;

/// Errors while configuring or building a simulation.
#[derive(Debug, Error)]
pub enum IsingError {
    /// The lattice edge length was zero.
    #[error("lattice size must be a positive integer, got {0}")]
    InvalidLatticeSize(usize),

    /// Temperature was not a finite positive number.
    #[error("temperature must be positive and finite, got {0}")]
    InvalidTemperature(f64),

    /// Coupling was not a finite positive number.
    #[error("coupling constant must be positive and finite, got {0}")]
    InvalidCoupling(f64),

    /// Zero single spin steps were requested.
    #[error("step budget must be a positive integer")]
    InvalidSteps,

    /// Zero workers were requested.
    #[error("worker count must be a positive integer")]
    InvalidWorkers,

    /// The spin grid could not be allocated.
    #[error("could not allocate a lattice of {size}x{size} spins")]
    Allocation {
        /// Requested edge length.
        size: usize,
    },

    /// A provided spin grid contained something other than -1 or +1.
    #[error("spin at site {index} is {value}, expected -1 or +1")]
    InvalidSpin {
        /// Row-major site index.
        index: usize,
        /// Offending value.
        value: i8,
    },

    /// A provided spin grid or lattice does not match the requested size.
    #[error("expected {expected} spins, got {found}")]
    SizeMismatch {
        /// Number of sites required.
        expected: usize,
        /// Number of sites provided.
        found: usize,
    },

    /// The worker pool could not be started.
    #[error("could not build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Errors from the visualization boundary. None of these abort a simulation.
#[derive(Debug, Error)]
pub enum VisualizationError {
    /// Writing or moving an image file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot pixel is neither spin color.
    #[error("pixel {index} has color {color:?} which is not a spin color")]
    UnknownColor {
        /// Row-major pixel index.
        index: usize,
        /// Offending color.
        color: (u8, u8, u8),
    },

    /// A snapshot cannot be decoded into a lattice because it is not square.
    #[error("snapshot is {width}x{height} but a lattice must be square")]
    NotSquare {
        /// Snapshot width.
        width: usize,
        /// Snapshot height.
        height: usize,
    },

    /// A snapshot has the wrong number of pixels for its dimensions.
    #[error("snapshot is {width}x{height} but has {found} pixels")]
    Dimensions {
        /// Snapshot width.
        width: usize,
        /// Snapshot height.
        height: usize,
        /// Number of pixels present.
        found: usize,
    },
}
