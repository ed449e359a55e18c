use cfg_aliases::cfg_aliases;

fn main() {
    // The script doesn't depend on our code
    println!("cargo:rerun-if-changed=build.rs");
    // But it *does* depend on cfgs!
    println!("cargo:rerun-if-env-changed=RUSTFLAGS");
    println!("cargo:rerun-if-env-changed=RUSTDOCFLAGS");

    // Higher level config group. This way, the short phrase represents not only that the feature is requested
    // but also available at compile time or documenting. (ie, enabling "xorg-xinput2" shouldn't compile err on Windows.)
    cfg_aliases! {
        // Xorg `xinput2` is requested and available. Adapted from winit.
        xinput2: { all(feature = "xorg-xinput2", any(docsrs, all(unix, not(any(target_os = "redox", target_family = "wasm", target_os = "android", target_os = "ios", target_os = "macos"))))) },
    }
}
