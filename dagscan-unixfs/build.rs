// Build script to compile the UnixFS Data message (SPEC_FULL.md §10).

fn main() -> Result<(), Box<dyn std::error::Error>> {
    prost_build::compile_protos(&["proto/unixfs.proto"], &["proto/"])?;

    println!("cargo:rerun-if-changed=proto/unixfs.proto");

    Ok(())
}
