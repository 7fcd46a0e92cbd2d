include!("build_support.rs");

fn main() {
    setup_pixel_deck_cfg_aliases();
}
