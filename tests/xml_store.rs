use std::collections::BTreeMap;

use diffphot::{validate_dtd, CandidateAnnuli, Passband, XMLOffset, XMLOffsetFile, XmlError};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn offsets() -> anyhow::Result<Vec<XMLOffset>> {
    Ok(vec![
        XMLOffset::new(
            "ferM_0001.fits",
            "ferM_0002.fits",
            "Johnson V".parse()?,
            740618465,
            -12.5,
            3.25,
            85,
            84,
        ),
        XMLOffset::new(
            " ferM_0001.fits",
            "ferM_0003.fits ",
            "Strömgren b".parse()?,
            740619012,
            0.125,
            -7.0625,
            101,
            97,
        ),
    ])
}

#[test]
fn offsets_round_trip() -> anyhow::Result<()> {
    init();
    let dir = tempfile::tempdir()?;
    let offsets = offsets()?;
    let mut file = XMLOffsetFile::new();
    for offset in &offsets {
        file.add(offset)?;
    }
    for encoding in ["utf-8", "us-ascii"] {
        let path = dir.path().join(format!("offsets.{}.xml", encoding));
        file.dump_with_encoding(&path, encoding)?;
        validate_dtd(&path)?;

        let contents = std::fs::read_to_string(&path)?;
        assert!(contents.contains(r#"<offsets size="2">"#));
        assert!(contents.contains(r#"date="Sun Jun 20 23:21:05 1993 UTC""#));
        if encoding == "us-ascii" {
            assert!(contents.is_ascii());
        }

        let loaded = XMLOffsetFile::open(&path)?;
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(0)?, offsets[0]);
        let all = loaded.iter().collect::<Result<Vec<_>, _>>()?;
        assert_eq!(all, offsets);
    }
    Ok(())
}

#[test]
fn empty_offsets_are_invalid() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("offsets.xml");
    let err = XMLOffsetFile::new().dump(&path).unwrap_err();
    assert!(matches!(err, XmlError::Validation(_)), "{:?}", err);
    assert!(path.exists());
    Ok(())
}

#[test]
fn unsupported_encoding() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut file = XMLOffsetFile::new();
    file.add(&offsets()?[0])?;
    let err = file
        .dump_with_encoding(dir.path().join("offsets.xml"), "latin-1")
        .unwrap_err();
    assert!(matches!(err, XmlError::Encoding(_)));
    Ok(())
}

#[test]
fn missing_documents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nonexistent.xml");
    assert!(matches!(
        XMLOffsetFile::open(&path),
        Err(XmlError::Missing { .. })
    ));
    assert!(matches!(
        CandidateAnnuli::xml_load(&path, false),
        Err(XmlError::Missing { .. })
    ));
}

#[test]
fn documents_must_be_valid() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("annuli.xml");
    // the band has no stdev attribute
    std::fs::write(
        &path,
        r#"<?xml version='1.0' encoding='utf-8' standalone='yes'?>
<!DOCTYPE annuli [
<!ELEMENT annuli (band*)>
<!ELEMENT band (candidate*)>
<!ATTLIST band name     CDATA #REQUIRED>
<!ATTLIST band stdev    CDATA #REQUIRED>
<!ELEMENT candidate EMPTY>
]>
<annuli>
  <band name="Johnson V"/>
</annuli>
"#,
    )?;
    let err = CandidateAnnuli::xml_load(&path, true).unwrap_err();
    assert!(matches!(err, XmlError::Validation(_)), "{:?}", err);
    assert!(err.is_invalid_format());

    std::fs::write(&path, "<annuli></annuli>")?;
    assert!(matches!(
        CandidateAnnuli::xml_load(&path, true),
        Err(XmlError::Validation(_))
    ));

    let offsets = dir.path().join("offsets.xml");
    let mut file = XMLOffsetFile::new();
    file.add(&crate::offsets()?[0])?;
    file.dump(&offsets)?;
    assert!(matches!(
        CandidateAnnuli::xml_load(&offsets, true),
        Err(XmlError::Format(_))
    ));
    Ok(())
}

fn annuli() -> anyhow::Result<BTreeMap<Passband, Vec<CandidateAnnuli>>> {
    let mut annuli = BTreeMap::new();
    annuli.insert(
        "Johnson V".parse()?,
        vec![
            CandidateAnnuli::new(3.5, 7., 2., 0.00712),
            CandidateAnnuli::new(3., 7., 2., 0.0084),
            CandidateAnnuli::new(2.5, 5.5, 2., 0.0131),
            CandidateAnnuli::new(4., 5.5, 2., 0.0102),
        ],
    );
    annuli.insert(
        "Johnson B".parse()?,
        vec![
            CandidateAnnuli::new(2.75, 6.25, 1.5, 0.021),
            CandidateAnnuli::new(2.25, 6.25, 1.5, 0.018),
        ],
    );
    Ok(annuli)
}

#[test]
fn annuli_round_trip() -> anyhow::Result<()> {
    init();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("annuli.xml");
    let annuli = annuli()?;
    CandidateAnnuli::xml_dump(&path, &annuli)?;
    validate_dtd(&path)?;

    let contents = std::fs::read_to_string(&path)?;
    assert!(contents.contains(
        r#"<band name="Johnson V" aperture="3.50000" annulus="7.00000" dannulus="2.00000" stdev="0.00712000">"#
    ));
    let b = contents.find(r#"name="Johnson B""#).unwrap();
    let v = contents.find(r#"name="Johnson V""#).unwrap();
    assert!(b < v);

    let loaded = CandidateAnnuli::xml_load(&path, false)?;
    assert_eq!(loaded.len(), 2);
    let v_band = &loaded[&"Johnson V".parse::<Passband>()?];
    assert_eq!(
        v_band,
        &vec![
            CandidateAnnuli::new(2.5, 5.5, 2., 0.0131),
            CandidateAnnuli::new(4., 5.5, 2., 0.0102),
            CandidateAnnuli::new(3., 7., 2., 0.0084),
            CandidateAnnuli::new(3.5, 7., 2., 0.00712),
        ]
    );
    let b_band = &loaded[&"Johnson B".parse::<Passband>()?];
    assert_eq!(
        b_band,
        &vec![
            CandidateAnnuli::new(2.25, 6.25, 1.5, 0.018),
            CandidateAnnuli::new(2.75, 6.25, 1.5, 0.021),
        ]
    );

    let best = CandidateAnnuli::xml_load(&path, true)?;
    assert_eq!(
        best[&"Johnson V".parse::<Passband>()?],
        vec![CandidateAnnuli::new(3.5, 7., 2., 0.00712)]
    );
    assert_eq!(
        best[&"Johnson B".parse::<Passband>()?],
        vec![CandidateAnnuli::new(2.25, 6.25, 1.5, 0.018)]
    );
    Ok(())
}

#[test]
fn dump_overwrites() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("annuli.xml");
    std::fs::write(&path, "not even XML")?;
    let mut annuli = annuli()?;
    annuli.retain(|filter, _| filter.letter() == "B");
    CandidateAnnuli::xml_dump_with_encoding(&path, &annuli, "ascii")?;
    let loaded = CandidateAnnuli::xml_load(&path, true)?;
    assert_eq!(loaded.len(), 1);
    Ok(())
}
