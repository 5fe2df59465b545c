//! Faster-than-real-time rendering through the live scheduler path.

use crate::scheduler::AudioScheduler;

/// Samples rendered between progress callbacks.
const CHUNK: usize = 4096;

/// Renders `frames` mono samples from `scheduler`.
///
/// `input` feeds effect mode and is read as silence past its end. `progress`
/// receives the running sample count after every chunk. Because the same
/// [`AudioScheduler`] drives the device callback, the result is
/// sample-identical to what a stream would play.
pub fn render_offline<F>(
    scheduler: &mut AudioScheduler,
    input: Option<&[f32]>,
    frames: usize,
    mut progress: F,
) -> Vec<f32>
where
    F: FnMut(usize),
{
    let mut out = vec![0.0f32; frames];
    let mut done = 0;
    while done < frames {
        let end = (done + CHUNK).min(frames);
        let chunk_input = input.map(|s| &s[done.min(s.len())..end.min(s.len())]);
        scheduler.render(chunk_input, &mut out[done..end]);
        done = end;
        progress(done);
    }
    out
}
