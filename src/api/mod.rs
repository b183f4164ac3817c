pub mod client;
pub mod logging;
pub mod mock_client;
pub mod stream;

pub use client::{ApiClient, ByteStream, TurnTransport};
pub use mock_client::{RecordedRequest, ScriptedResponse, ScriptedTransport};
pub use stream::{frame_stream, FrameDecoder, FrameStream};
