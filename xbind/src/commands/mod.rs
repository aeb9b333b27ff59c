pub mod bind;
pub mod decode;
pub mod roundtrip;

pub use bind::run as bind;
pub use decode::run as decode;
pub use roundtrip::run as roundtrip;
