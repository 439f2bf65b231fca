// Build script for parleyctl - embeds version at compile time

fn main() {
    // Release pipelines may override the version; otherwise use Cargo.toml
    let version =
        std::env::var("PARLEY_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=PARLEY_VERSION={}", version);

    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=PARLEY_VERSION");
}
