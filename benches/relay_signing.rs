//! Benchmarks for building and signing relay requests
//!
//! This benchmark suite covers the local work done for every relayed submission:
//! - Call encoding (split calldata plus the aggregated `proxy(...)` call)
//! - Struct hashing (packing the request fields and hashing them)
//! - Request signing and serialization for `/submit`

use std::str::FromStr as _;

use alloy::signers::Signer as _;
use alloy::signers::local::PrivateKeySigner;
use criterion::{Criterion, criterion_group, criterion_main};
use polymarket_relayer_client::relayer::signing::UnsignedRelayRequest;
use polymarket_relayer_client::relayer::types::{
    Market, Operation, RelayContext, WalletIdentity,
};
use polymarket_relayer_client::relayer::{
    CallEncoder, ProxyWalletStrategy, StructHashInput, WalletSigningStrategy as _,
    encode_aggregate,
};
use polymarket_relayer_client::types::{Address, B256, U256};
use polymarket_relayer_client::{ContractConfig, POLYGON, contract_config};

// Dummy private key for benchmarking (DO NOT USE IN PRODUCTION)
const BENCH_PRIVATE_KEY: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000001";

fn setup() -> (ContractConfig, PrivateKeySigner, Market) {
    let contracts = *contract_config(POLYGON).expect("Polygon config");
    let signer = PrivateKeySigner::from_str(BENCH_PRIVATE_KEY)
        .expect("valid key")
        .with_chain_id(Some(POLYGON));
    let market = Market::binary(B256::repeat_byte(0x7f), false);

    (contracts, signer, market)
}

fn unsigned(
    contracts: ContractConfig,
    signer: &PrivateKeySigner,
    market: &Market,
) -> UnsignedRelayRequest {
    let calls = CallEncoder::new(contracts)
        .split_calls(market, U256::from(1_000_000))
        .expect("binary market");

    UnsignedRelayRequest::builder()
        .identity(WalletIdentity::derived(signer.address(), POLYGON).expect("Polygon proxy"))
        .contracts(contracts)
        .context(
            RelayContext::builder()
                .relay_address(Address::repeat_byte(0xa7))
                .nonce(U256::from(42))
                .build(),
        )
        .calls(calls)
        .operation(Operation::Split)
        .build()
}

/// Benchmark call encoding
fn bench_encoding(c: &mut Criterion) {
    let (contracts, _, market) = setup();
    let encoder = CallEncoder::new(contracts);

    let mut group = c.benchmark_group("relay_signing/encoding");

    group.bench_function("split_calls", |b| {
        b.iter(|| {
            std::hint::black_box(
                encoder
                    .split_calls(std::hint::black_box(&market), U256::from(1_000_000))
                    .expect("binary market"),
            )
        });
    });

    let calls = encoder
        .split_calls(&market, U256::from(1_000_000))
        .expect("binary market");

    group.bench_function("aggregate", |b| {
        b.iter(|| std::hint::black_box(encode_aggregate(&calls).expect("non-empty calls")));
    });

    group.finish();
}

/// Benchmark struct hashing
fn bench_struct_hash(c: &mut Criterion) {
    let (contracts, signer, market) = setup();
    let calls = CallEncoder::new(contracts)
        .split_calls(&market, U256::from(1_000_000))
        .expect("binary market");
    let data = encode_aggregate(&calls).expect("non-empty calls");

    let input = StructHashInput::builder()
        .from(signer.address())
        .to(contracts.proxy_factory)
        .data(data)
        .nonce(U256::from(42))
        .relay_hub(contracts.relay_hub)
        .relay_address(Address::repeat_byte(0xa7))
        .build();

    let mut group = c.benchmark_group("relay_signing/struct_hash");

    group.bench_function("split", |b| {
        b.iter(|| std::hint::black_box(std::hint::black_box(&input).struct_hash()));
    });

    group.finish();
}

/// Benchmark request signing and serialization
fn bench_signing(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let (contracts, signer, market) = setup();
    let request = unsigned(contracts, &signer, &market);
    let strategy = ProxyWalletStrategy::default();

    let mut group = c.benchmark_group("relay_signing/signing");

    group.bench_function("proxy_request", |b| {
        b.iter(|| {
            runtime.block_on(async {
                std::hint::black_box(
                    strategy
                        .sign_request(&signer, request.clone())
                        .await
                        .expect("sign succeeds"),
                )
            })
        });
    });

    let signed = runtime
        .block_on(strategy.sign_request(&signer, request))
        .expect("sign succeeds");

    group.bench_function("to_json", |b| {
        b.iter(|| {
            let json = serde_json::to_string(std::hint::black_box(&signed))
                .expect("serialization succeeds");
            std::hint::black_box(json)
        });
    });

    group.finish();
}

criterion_group!(
    relay_signing_benches,
    bench_encoding,
    bench_struct_hash,
    bench_signing,
);

criterion_main!(relay_signing_benches);
