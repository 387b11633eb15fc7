//! Worker command-line arguments.

use crate::{EffectParameters, ProtocolRevision, WindowHandle};

/// Positional worker arguments:
/// `[gpu(0|1), targetWindow, opacity, brightness, textBrightness, blurType]`.
///
/// Legacy workers omit `textBrightness`. The target window is passed in
/// decimal.
pub fn worker_args(
    rev: ProtocolRevision,
    target: WindowHandle,
    params: &EffectParameters,
) -> Vec<String> {
    let mut args = vec![
        if params.gpu { "1" } else { "0" }.to_string(),
        target.0.to_string(),
        params.opacity.to_string(),
        params.brightness.to_string(),
    ];
    if rev.has_text_brightness() {
        args.push(params.text_brightness.to_string());
    }
    args.push(params.blur.as_i32().to_string());
    args
}
