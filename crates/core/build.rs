fn main() -> Result<(), Box<dyn std::error::Error>> {
    prost_build::compile_protos(&["proto/steammessages.proto"], &["proto"])?;
    println!("cargo:rerun-if-changed=proto/steammessages.proto");
    Ok(())
}
