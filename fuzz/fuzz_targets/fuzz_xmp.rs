#![no_main]

use imeta_io::{Iptc, Xmp};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(mut xmp) = Xmp::from_bytes(data) {
        let _ = xmp.caption();
        let _ = xmp.photographer_names();
        let _ = xmp.contact_city();
        let _ = xmp.rating();

        xmp.set_caption(Some("caption"));
        xmp.set_contact_city(None);
        xmp.set_supplemental_categories(Vec::new());
        xmp.set_rating(Some(3));
        let _ = xmp.to_bytes();
    }

    if let Ok(iptc) = Iptc::from_bytes(data) {
        let _ = iptc.to_bytes();
    }
});
