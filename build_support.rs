// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

// Shared cfg_aliases configuration function
// Called from build.rs: setup_pixel_deck_cfg_aliases();

fn setup_pixel_deck_cfg_aliases() {
    use cfg_aliases::cfg_aliases;

    cfg_aliases! {
        // Platform aliases
        wasm: { target_arch = "wasm32" },
        mobile: { any(target_os = "android", target_os = "ios") },
        desktop: { not(any(wasm, mobile)) },

        // Rendering backend aliases
        gl_backend: { all(feature = "winit", desktop) },
    }
}
