//! Subcommand handlers.

use std::{path::Path, sync::Arc};

use cardlink_vpos::{
    FieldList, MerchantConfig, MerchantContext, PaymentError, RedirectPayments, Result,
    redirect::{RedirectMethod, RedirectPaymentRequest},
    reference::generate_reference_code,
    script::fetch_client_script,
    transport::HttpTransport,
};
use clap::Args;
use tracing::info;

/// Arguments of `vpos reference`.
#[derive(Args, Debug)]
pub struct ReferenceArgs {
    /// Order id; only its digits are used.
    #[arg(long)]
    pub order_id: String,

    /// Amount in minor units.
    #[arg(long)]
    pub amount: u64,

    /// Customer code; defaults to the configured one.
    #[arg(long)]
    pub customer_code: Option<String>,
}

/// Arguments of `vpos redirect`.
#[derive(Args, Debug)]
pub struct RedirectArgs {
    /// `iris` or `paypal`.
    pub method: RedirectMethod,

    /// Amount in minor units.
    #[arg(long)]
    pub amount: u64,

    /// Order id; random when omitted.
    #[arg(long)]
    pub order_id: Option<String>,

    /// Payer email.
    #[arg(long, default_value = "")]
    pub email: String,

    /// Currency code.
    #[arg(long)]
    pub currency: Option<String>,

    /// Print the signed fields as JSON instead of the HTML form.
    #[arg(long)]
    pub json: bool,
}

/// Arguments of `vpos callback`.
#[derive(Args, Debug)]
pub struct CallbackArgs {
    /// Callback fields as `name=value`, in the order received.
    #[arg(value_parser = parse_field, required = true)]
    pub fields: Vec<(String, String)>,
}

fn parse_field(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.to_owned(), value.to_owned()))
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))
}

fn load_context(path: &Path) -> Result<(MerchantConfig, Arc<MerchantContext>)> {
    let config = MerchantConfig::from_file(path)?;
    let context = Arc::new(MerchantContext::from_config(&config)?);
    Ok((config, context))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| PaymentError::InvalidInput(format!("cannot render JSON: {e}")))?;
    println!("{json}");
    Ok(())
}

pub fn run_check(path: &Path) -> Result<()> {
    let (config, context) = load_context(path)?;
    let credentials = context.credentials();
    info!(
        merchant_id = credentials.merchant_id(),
        acquirer = %config.payment.acquirer,
        signer = credentials.signer().is_ok(),
        verifier = credentials.verifier().is_ok(),
        "configuration is valid"
    );
    println!("{}: ok", path.display());
    Ok(())
}

pub fn run_settings(path: &Path) -> Result<()> {
    let (_, context) = load_context(path)?;
    print_json(&context.settings_summary())
}

pub fn run_reference(path: &Path, args: &ReferenceArgs) -> Result<()> {
    let customer_code = match &args.customer_code {
        Some(code) => code.clone(),
        None => load_context(path)?.1.credentials().customer_code().to_owned(),
    };
    println!("{}", generate_reference_code(&customer_code, &args.order_id, args.amount)?);
    Ok(())
}

pub fn run_redirect(path: &Path, args: &RedirectArgs) -> Result<()> {
    let (_, context) = load_context(path)?;
    let request = RedirectPaymentRequest {
        order_id: args.order_id.clone(),
        amount: args.amount,
        currency: args.currency.clone(),
        payer_email: args.email.clone(),
        ..RedirectPaymentRequest::default()
    };
    let signed = RedirectPayments::new(context).build_request(args.method, &request)?;

    if args.json {
        print_json(&signed.fields)
    } else {
        println!("{}", signed.form_html);
        Ok(())
    }
}

pub fn run_callback(path: &Path, args: &CallbackArgs) -> Result<()> {
    let (_, context) = load_context(path)?;
    let fields = FieldList::from(args.fields.clone());
    let outcome = RedirectPayments::new(context).process_callback(&fields)?;
    println!("{} ({})", outcome.status, if outcome.is_success() { "paid" } else { "not paid" });
    Ok(())
}

pub fn run_client_script(path: &Path) -> Result<()> {
    let (config, context) = load_context(path)?;
    let transport = HttpTransport::with_config(&config.transport)?;
    print!("{}", fetch_client_script(&context, &transport)?);
    Ok(())
}
