use anyhow::{bail, Context, Result};
use warp_attestations::api::AttestationApi;
use warp_attestations::{ChainType, VALIDATOR_COUNT};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(chain), Some(index), Some(signature)) = (args.next(), args.next(), args.next()) else {
        bail!("usage: submit <evm|chia> <validator-index> <signature-hex>");
    };

    let chain_type = match chain.as_str() {
        "evm" => ChainType::Evm,
        "chia" => ChainType::Chia,
        other => bail!("unknown chain type {other:?}, expected evm or chia"),
    };
    let validator_index: u8 = index
        .parse()
        .with_context(|| format!("validator index {index:?} is not an integer"))?;
    if usize::from(validator_index) >= VALIDATOR_COUNT {
        bail!("validator index {validator_index} outside 0..{VALIDATOR_COUNT}");
    }

    let base_url =
        std::env::var("ATTESTATIONS_API_URL").context("set ATTESTATIONS_API_URL to the API base url")?;
    let api = AttestationApi::new(base_url);
    let attestation_id = api.submit(chain_type, validator_index, &signature).await?;
    println!("attestation accepted: {attestation_id}");
    Ok(())
}
