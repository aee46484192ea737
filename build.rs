use std::{env, error::Error, path::PathBuf};

fn main() -> Result<(), Box<dyn Error>> {
    // Trimmed copies of LND's lnrpc protos: only the RPCs the engine calls.
    let proto_dir = PathBuf::from("protos/lnd");
    println!("cargo:rerun-if-changed={}", proto_dir.display());

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let protos = [
        proto_dir.join("lightning.proto"),
        proto_dir.join("walletunlocker.proto"),
    ];

    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .out_dir(&out_dir)
        .compile_protos(&protos, &[proto_dir])?;
    Ok(())
}
