#![no_main]

use imeta_io::Asset;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(mut asset) = Asset::from_bytes(data) {
        // Unchanged save
        let _ = asset.to_bytes();

        // Save with metadata changes, then parse the result again
        if let Ok(xmp) = asset.xmp() {
            xmp.set_headline(Some("fuzz"));
            xmp.set_keywords(vec!["a".into(), "<&>".into()]);
        }
        if let Ok(iptc) = asset.iptc() {
            iptc.set_city(Some("fuzz"));
        }
        if let Ok(out) = asset.to_bytes() {
            let _ = Asset::from_bytes(&out);
        }
    }
});
