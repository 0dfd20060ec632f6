use imeta_io::{test_utils::*, Asset, Iptc, Xmp};
use proptest::prelude::*;

fn text_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9&<>'\" ,.øé©-]{1,40}"
}

fn signature_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        Just(vec![0xFF, 0xD8]),
        Just(b"\x89PNG\r\n\x1a\n".to_vec()),
        Just(b"RIFF\x40\0\0\0WEBP".to_vec()),
        Just(b"8BPS\0\x01".to_vec()),
        Just(Vec::new()),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_arbitrary_input_never_panics(
        prefix in signature_strategy(),
        body in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        let mut data = prefix;
        data.extend_from_slice(&body);
        if let Ok(mut asset) = Asset::from_bytes(&data) {
            let _ = asset.xmp().map(|x| x.keywords());
            let _ = asset.iptc().map(|i| i.city().map(str::to_string));
            let _ = asset.exif().map(|e| e.date_time_original());
            let _ = asset.to_bytes();
        }
    }

    #[test]
    fn prop_unchanged_jpeg_is_byte_identical(
        segments in prop::collection::vec(
            (0xE2u8..=0xEC, prop::collection::vec(any::<u8>(), 0..64)),
            0..6,
        ),
    ) {
        let records: Vec<(u8, &[u8])> =
            segments.iter().map(|(m, d)| (*m, d.as_slice())).collect();
        let data = build_jpeg(&records);
        let mut asset = Asset::from_bytes(&data).unwrap();
        prop_assert_eq!(asset.to_bytes().unwrap(), data);
    }

    #[test]
    fn prop_xmp_text_survives_jpeg_save(headline in text_strategy(), city in text_strategy()) {
        let mut asset = Asset::from_bytes(&minimal_jpeg()).unwrap();
        let xmp = asset.xmp().unwrap();
        xmp.set_headline(Some(&headline));
        xmp.set_city(Some(&city));
        let out = asset.to_bytes().unwrap();

        let mut reopened = Asset::from_bytes(&out).unwrap();
        let xmp = reopened.xmp().unwrap();
        prop_assert_eq!(xmp.headline(), Some(headline));
        prop_assert_eq!(xmp.city(), Some(city));
    }

    #[test]
    fn prop_xmp_keywords_survive_serialization(
        keywords in prop::collection::vec(text_strategy(), 0..8),
    ) {
        let mut xmp = Xmp::new();
        xmp.set_keywords(keywords.clone());
        let reparsed = Xmp::from_bytes(&xmp.to_bytes().unwrap()).unwrap();
        prop_assert_eq!(reparsed.keywords(), keywords);
    }

    #[test]
    fn prop_iptc_values_survive_encoding(
        keywords in prop::collection::vec("\\PC{0,60}", 0..8),
        caption in "\\PC{0,400}",
    ) {
        let mut iptc = Iptc::new();
        iptc.set_keywords(keywords.clone());
        iptc.set_caption(Some(&caption));

        let decoded = Iptc::from_bytes(&iptc.to_bytes().unwrap()).unwrap();
        prop_assert_eq!(decoded.keywords(), keywords.as_slice());
        prop_assert_eq!(decoded.caption(), Some(caption.as_str()));
    }
}
