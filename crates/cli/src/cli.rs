use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "vbx")]
#[command(about = "VirtualBox web service client - logs on and reports the service version")]
#[command(version)]
pub struct Cli {
    /// Web service endpoint
    #[arg(default_value = "http://127.0.0.1:18083", value_name = "ENDPOINT")]
    pub endpoint: String,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
