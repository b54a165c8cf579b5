//! Build script for warden-proto
//!
//! Compiles protobuf definitions using tonic-prost-build. A vendored
//! `protoc` is used unless `PROTOC` already points at one.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_root = "../../proto";

    let protos = [
        "warden/v1/common.proto",
        "warden/v1/auth.proto",
        "warden/v1/user.proto",
        "warden/v1/policy.proto",
    ];

    let mut config = prost_build::Config::new();
    if std::env::var_os("PROTOC").is_none() {
        let protoc = protoc_bin_vendored::protoc_bin_path().map_err(|e| e.to_string())?;
        config.protoc_executable(protoc);
    }

    let proto_paths: Vec<_> = protos
        .iter()
        .map(|p| format!("{proto_root}/{p}"))
        .collect();

    for path in &proto_paths {
        println!("cargo:rerun-if-changed={path}");
    }

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_with_config(config, &proto_paths, &[proto_root.to_string()])?;

    Ok(())
}
