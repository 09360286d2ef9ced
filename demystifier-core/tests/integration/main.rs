// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests over the build log fixtures in the workspace's `fixtures` directory.

mod export;
mod fixtures;
mod flakes;
mod pipeline;
