// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod policy;
pub mod pool;
pub mod utils;

pub use config::EngineConfig;
pub use engine::{Engine, RetryPolicy};
pub use error::{EngineError, ResultEngine};
pub use pool::{EnginePool, JobHandle};
