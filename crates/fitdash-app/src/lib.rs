// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod debounce;
pub mod forms;
pub mod ids;
pub mod metrics;
pub mod model;
pub mod navigation;
pub mod source;
pub mod state;

pub use debounce::*;
pub use forms::*;
pub use ids::*;
pub use metrics::*;
pub use model::*;
pub use navigation::*;
pub use source::*;
pub use state::*;
