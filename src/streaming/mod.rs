//! Real-time audio streaming: a blocking ring buffer between a producer
//! thread (sample generation) and a consumer (the host audio sink).

mod ring_buffer;

#[cfg(feature = "streaming")]
mod audio_driver;

pub use ring_buffer::{RingBuffer, RingBufferStats};

#[cfg(feature = "streaming")]
pub use audio_driver::{AudioDriver, AudioSink, RodioSink};
