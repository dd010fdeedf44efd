mod common;

use std::sync::Arc;

use anyhow::Result;
use credkit_keys::{
    Accessibility, CredentialStore, DigestAlgorithm, FileCredentialStore, FileStoreConfig,
    GeneratorConfig, KeyError, KeyPair, KeyPairGenerator, KeyType, MemoryCredentialStore,
    RecordClass,
};

use common::{generate, logger, FlakyStore};

#[test]
fn ec_generation_covers_named_curves_only() {
    let generator = KeyPairGenerator::new(Arc::new(MemoryCredentialStore::new()), logger());
    for bits in [192, 256, 384, 521] {
        let pair = generator
            .generate(&GeneratorConfig::new(KeyType::EllipticCurve, bits, "ec"))
            .unwrap();
        assert_eq!(pair.public_key().bits(), bits);
        assert_eq!(pair.private_key().bits(), bits);
    }
    for bits in [128, 0, 255, 2048] {
        assert!(matches!(
            generator.generate(&GeneratorConfig::new(KeyType::EllipticCurve, bits, "ec")),
            Err(KeyError::InvalidConfiguration(_))
        ));
    }
    assert!(matches!(
        generator.generate(&GeneratorConfig::new(KeyType::Rsa, 100, "rsa")),
        Err(KeyError::InvalidConfiguration(_))
    ));
}

#[test]
fn persist_and_delete_are_idempotent() -> Result<()> {
    let store = Arc::new(MemoryCredentialStore::new());
    let pair = generate(
        store.clone(),
        &GeneratorConfig::new(KeyType::EllipticCurve, 256, "twice"),
    );
    assert!(store.is_empty());

    pair.persist(Accessibility::WhenUnlocked)?;
    pair.persist(Accessibility::WhenUnlocked)?;
    assert_eq!(store.len(), 2);
    assert_eq!(
        store.load("twice", RecordClass::PrivateKey)?.accessibility,
        Accessibility::WhenUnlocked
    );

    pair.delete()?;
    pair.delete()?;
    assert!(store.is_empty());
    assert!(matches!(
        KeyPair::load(store, "twice", logger()),
        Err(KeyError::LoadFailed(_))
    ));
    Ok(())
}

#[test]
fn persistent_generation_writes_both_halves() -> Result<()> {
    let store = Arc::new(MemoryCredentialStore::new());
    let config = GeneratorConfig::new(KeyType::EllipticCurve, 384, "persisted")
        .with_persistent(true)
        .with_accessibility(Accessibility::AfterFirstUnlockThisDeviceOnly);
    let pair = generate(store.clone(), &config);
    assert!(store.contains("persisted", RecordClass::PublicKey));
    assert!(store.contains("persisted", RecordClass::PrivateKey));
    assert_eq!(
        store.load("persisted", RecordClass::PublicKey)?.accessibility,
        Accessibility::AfterFirstUnlockThisDeviceOnly
    );

    let loaded = KeyPair::load(store, "persisted", logger())?;
    let signature = loaded.sign(b"reloaded", DigestAlgorithm::Sha384)?;
    assert!(pair.verify(b"reloaded", &signature, DigestAlgorithm::Sha384)?);
    Ok(())
}

#[test]
fn generation_rolls_back_a_half_written_pair() {
    let store = Arc::new(FlakyStore::failing_save(2));
    let err = KeyPairGenerator::new(store.clone(), logger())
        .generate(
            &GeneratorConfig::new(KeyType::EllipticCurve, 256, "half").with_persistent(true),
        )
        .unwrap_err();
    assert!(matches!(err, KeyError::GenerationFailed(_)), "{err}");
    assert_eq!(store.saves(), 2);
    assert!(store.inner.is_empty());
}

#[test]
fn persist_rolls_back_only_its_own_writes() -> Result<()> {
    // Fresh pair: first save lands, second fails, nothing remains.
    let store = Arc::new(FlakyStore::failing_save(2));
    let pair = generate(
        store.clone(),
        &GeneratorConfig::new(KeyType::EllipticCurve, 256, "fresh"),
    );
    let err = pair.persist(Accessibility::default()).unwrap_err();
    assert!(matches!(err, KeyError::SaveFailed(_)), "{err}");
    assert!(store.inner.is_empty());

    // Pre-existing halves survive a failed re-persist.
    let store = Arc::new(FlakyStore::failing_save(4));
    let pair = generate(
        store.clone(),
        &GeneratorConfig::new(KeyType::EllipticCurve, 256, "existing"),
    );
    pair.persist(Accessibility::default())?;
    assert!(matches!(
        pair.persist(Accessibility::default()),
        Err(KeyError::SaveFailed(_))
    ));
    assert_eq!(store.inner.len(), 2);
    Ok(())
}

#[test]
fn delete_reports_backend_failures() -> Result<()> {
    let store = Arc::new(FlakyStore::failing_deletes());
    let pair = generate(
        store.clone(),
        &GeneratorConfig::new(KeyType::EllipticCurve, 256, "stuck").with_persistent(true),
    );
    assert!(matches!(pair.delete(), Err(KeyError::DeleteFailed(_))));
    assert_eq!(store.inner.len(), 2);
    Ok(())
}

#[test]
fn secure_element_keys_sign_but_never_export() -> Result<()> {
    let store = Arc::new(MemoryCredentialStore::with_secure_element());
    assert!(store.capabilities().hardware_backed);
    let config = GeneratorConfig::new(KeyType::EllipticCurve, 256, "enclave")
        .with_secure_element(true)
        .with_persistent(true);
    let pair = generate(store.clone(), &config);
    assert!(pair.private_key().is_store_backed());
    assert!(!pair.private_key().is_extractable());
    assert_eq!(pair.export_public_key()?.len(), 65);
    assert!(matches!(
        pair.export_private_key(),
        Err(KeyError::NotExtractable)
    ));

    for digest in [DigestAlgorithm::Sha1, DigestAlgorithm::Sha256, DigestAlgorithm::Sha512] {
        let signature = pair.sign(b"attest", digest)?;
        assert!(pair.verify(b"attest", &signature, digest)?);
    }

    // Reloading resolves the private key back into the element.
    let loaded = KeyPair::load(store.clone(), "enclave", logger())?;
    assert!(loaded.private_key().is_store_backed());
    assert_eq!(&loaded.private_key().public_key()?, pair.public_key());
    let signature = loaded.sign(b"again", DigestAlgorithm::Sha256)?;
    assert!(pair.verify(b"again", &signature, DigestAlgorithm::Sha256)?);

    pair.delete()?;
    let se = store.secure_element().expect("secure element");
    assert!(se.public_key("enclave").is_err());
    Ok(())
}

#[test]
fn secure_element_requests_are_never_downgraded() {
    let with_se = Arc::new(MemoryCredentialStore::with_secure_element());
    assert!(matches!(
        KeyPairGenerator::new(with_se, logger()).generate(
            &GeneratorConfig::new(KeyType::Rsa, 2048, "rsa-se").with_secure_element(true)
        ),
        Err(KeyError::UnsupportedStoreTarget(_))
    ));

    let without_se = Arc::new(MemoryCredentialStore::new());
    assert!(matches!(
        KeyPairGenerator::new(without_se.clone(), logger()).generate(
            &GeneratorConfig::new(KeyType::EllipticCurve, 256, "ec-se").with_secure_element(true)
        ),
        Err(KeyError::UnsupportedStoreTarget(_))
    ));
    assert!(without_se.is_empty());
}

#[test]
fn file_store_survives_reopen() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = FileStoreConfig::new(dir.path().to_path_buf());
    let exported = {
        let store = Arc::new(FileCredentialStore::new(config.clone(), logger())?);
        assert!(store.capabilities().persistent);
        let pair = generate(
            store,
            &GeneratorConfig::new(KeyType::Rsa, 1024, "file/rsa").with_persistent(true),
        );
        pair.persist(Accessibility::default())?;
        pair.export_private_key()?
    };

    let store = Arc::new(FileCredentialStore::new(config, logger())?);
    let loaded = KeyPair::load(store, "file/rsa", logger())?;
    assert_eq!(loaded.export_private_key()?, exported);
    assert_eq!(loaded.spec().bits(), 1024);

    loaded.delete()?;
    loaded.delete()?;
    Ok(())
}

#[test]
fn file_store_accepts_long_labels() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = Arc::new(FileCredentialStore::new(
        FileStoreConfig::new(dir.path().to_path_buf()),
        logger(),
    )?);
    let label = "CN=build-agent,OU=".to_string() + &"x".repeat(200);
    let pair = generate(
        store.clone(),
        &GeneratorConfig::new(KeyType::EllipticCurve, 192, &label).with_persistent(true),
    );
    let loaded = KeyPair::load(store, &label, logger())?;
    let signature = loaded.sign(b"long label", DigestAlgorithm::Sha256)?;
    assert!(pair.verify(b"long label", &signature, DigestAlgorithm::Sha256)?);
    Ok(())
}
