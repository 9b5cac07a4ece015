use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use cca_pka::{
    curves::{NID_BRAINPOOL_P512R1, NID_PRIME256V1, NID_SECP521R1},
    facility::MockFacility,
    generate_ecc_key_pair, generate_rsa_key_pair, get_key_type, reencipher_key,
    token::{
        find_section,
        header::{SECTION_ID_ECC_PUBL, SECTION_ID_RSA_PUBL},
        EccPublicKey, TokenBuilder, MAX_PKA_KEY_TOKEN_SIZE,
    },
    ReencipherDirection,
};

fn ecc_token(nid: i32) -> Vec<u8> {
    let facility = MockFacility::new();
    let mut token = vec![0u8; MAX_PKA_KEY_TOKEN_SIZE];
    let length = generate_ecc_key_pair(&facility, nid, &mut token).unwrap();
    token.truncate(length);
    token
}

fn rsa_token(modulus_bits: usize) -> Vec<u8> {
    let facility = MockFacility::new();
    let mut token = vec![0u8; MAX_PKA_KEY_TOKEN_SIZE];
    let length = generate_rsa_key_pair(&facility, modulus_bits, 65537, &mut token).unwrap();
    token.truncate(length);
    token
}

fn scanner_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("scanner");

    // Benchmark classification of real-layout tokens
    for (name, token) in [
        ("ecc_p256", ecc_token(NID_PRIME256V1)),
        ("ecc_p521", ecc_token(NID_SECP521R1)),
        ("rsa_4096", rsa_token(4096)),
    ] {
        group.bench_with_input(BenchmarkId::new("get_key_type", name), &token, |b, token| {
            b.iter(|| get_key_type(token))
        });
    }

    // Benchmark a scan that walks many sections before the match
    for count in [4usize, 16, 64] {
        let mut builder = TokenBuilder::internal_pka();
        for _ in 0..count {
            builder = builder.section(0x10, 0, &[0u8; 32]);
        }
        let token = builder.section(SECTION_ID_RSA_PUBL, 0, &[0u8; 12]).build().unwrap();

        group.bench_with_input(BenchmarkId::new("find_section", count), &token, |b, token| {
            b.iter(|| find_section(token, SECTION_ID_RSA_PUBL))
        });
    }

    let token = ecc_token(NID_BRAINPOOL_P512R1);
    group.bench_function("ecc_public_key", |b| {
        b.iter(|| {
            find_section(&token, SECTION_ID_ECC_PUBL).unwrap();
            EccPublicKey::from_token(&token)
        })
    });

    group.finish();
}

fn facility_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("mock_facility");

    // Clearing the call log between iterations keeps it from growing
    let facility = MockFacility::new();
    group.bench_function("generate_ecc_p256", |b| {
        b.iter_batched(
            || {
                facility.clear_calls();
                vec![0u8; MAX_PKA_KEY_TOKEN_SIZE]
            },
            |mut token| generate_ecc_key_pair(&facility, NID_PRIME256V1, &mut token),
            BatchSize::SmallInput,
        )
    });

    let token = rsa_token(2048);
    group.bench_function("reencipher_rsa_2048", |b| {
        b.iter_batched(
            || {
                facility.clear_calls();
                token.clone()
            },
            |mut token| reencipher_key(&facility, &mut token, ReencipherDirection::ToNewMasterKey),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, scanner_benchmarks, facility_benchmarks);
criterion_main!(benches);
