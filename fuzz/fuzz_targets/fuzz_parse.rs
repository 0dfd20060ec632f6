#![no_main]

use imeta_io::{Asset, Field};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parsing arbitrary input must only ever return errors, never panic
    if let Ok(mut asset) = Asset::from_bytes(data) {
        let _ = asset.media_type();
        let _ = asset.container();

        if let Ok(xmp) = asset.xmp() {
            let _ = xmp.keywords();
            let _ = xmp.contact_email();
        }
        if let Ok(iptc) = asset.iptc() {
            let _ = iptc.keywords();
        }
        if let Ok(exif) = asset.exif() {
            let _ = exif.camera();
            let _ = exif.gps();
            let _ = exif.aperture();
        }
        if let Ok(agg) = asset.aggregate() {
            for field in Field::ALL {
                let _ = agg.get(field);
            }
        }
    }
});
