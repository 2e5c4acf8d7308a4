// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

fn main() {
    // Node addon linker flags are only needed for the napi bindings.
    if std::env::var_os("CARGO_FEATURE_NAPI").is_some() {
        napi_build::setup();
    }
}
