// Include generated prost/tonic code. build.rs emits lnrpc.rs into OUT_DIR
pub mod lnrpc {
    #![allow(clippy::all, clippy::pedantic)]
    include!(concat!(env!("OUT_DIR"), "/lnrpc.rs"));
}
