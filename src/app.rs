use clap::Arg;

/// Parsed command-line arguments.
pub struct App {
    data_path: String,
    config_path: String,
    method: Option<String>,
    account: Option<String>,
    group: Option<String>,
    projection_path: Option<String>,
    export_path: Option<String>,
    report_path: Option<String>,
    add_spec: Option<String>,
    refresh: bool,
    clear_cache: bool,
    offline: bool,
}

impl App {
    pub fn new() -> App {
        let matches = clap::App::new("crypto_pnl")
            .version("0.1.0")
            .about("Tracks crypto trades and computes P&L, ROI and valuations")
            .arg(Arg::with_name("data_path")
                .short("d")
                .long("data")
                .takes_value(true)
                .help("Ledger data file (JSON)"))
            .arg(Arg::with_name("config_path")
                .short("c")
                .long("config")
                .takes_value(true)
                .help("Config file (YAML)"))
            .arg(Arg::with_name("method")
                .short("m")
                .long("method")
                .takes_value(true)
                .help("Cost basis method: fifo, lifo or average"))
            .arg(Arg::with_name("account")
                .long("account")
                .takes_value(true)
                .help("Restrict the report to one account"))
            .arg(Arg::with_name("group")
                .long("group")
                .takes_value(true)
                .help("Restrict the report to one account group"))
            .arg(Arg::with_name("projection")
                .short("p")
                .long("projection")
                .takes_value(true)
                .help("What-if transaction table to project (CSV)"))
            .arg(Arg::with_name("export")
                .long("export")
                .takes_value(true)
                .help("Write the trade history with profits (CSV)"))
            .arg(Arg::with_name("report")
                .short("o")
                .long("report")
                .takes_value(true)
                .help("Write the per-asset breakdown (CSV)"))
            .arg(Arg::with_name("add")
                .long("add")
                .takes_value(true)
                .help("Append a trade: TYPE,ASSET,PRICE,QTY[,EXCHANGE,ORDER,ACCOUNT]"))
            .arg(Arg::with_name("refresh")
                .long("refresh")
                .takes_value(false)
                .help("Refresh cached prices for all ledger assets"))
            .arg(Arg::with_name("clear")
                .long("clear")
                .takes_value(false)
                .help("Clears the price cache"))
            .arg(Arg::with_name("offline")
                .long("offline")
                .takes_value(false)
                .help("Never hit the quote API"))
            .get_matches();

        App {
            data_path: matches.value_of("data_path")
                .unwrap_or("crypto_data.json")
                .to_string(),
            config_path: matches.value_of("config_path")
                .unwrap_or("config.yaml")
                .to_string(),
            method: matches.value_of("method").map(str::to_string),
            account: matches.value_of("account").map(str::to_string),
            group: matches.value_of("group").map(str::to_string),
            projection_path: matches.value_of("projection").map(str::to_string),
            export_path: matches.value_of("export").map(str::to_string),
            report_path: matches.value_of("report").map(str::to_string),
            add_spec: matches.value_of("add").map(str::to_string),
            refresh: matches.is_present("refresh"),
            clear_cache: matches.is_present("clear"),
            offline: matches.is_present("offline"),
        }
    }

    pub fn get_data_path(&self) -> &str { &self.data_path }
    pub fn get_config_path(&self) -> &str { &self.config_path }
    pub fn get_method(&self) -> Option<&str> { self.method.as_deref() }
    pub fn get_account(&self) -> Option<&str> { self.account.as_deref() }
    pub fn get_group(&self) -> Option<&str> { self.group.as_deref() }
    pub fn get_projection_path(&self) -> Option<&str> { self.projection_path.as_deref() }
    pub fn get_export_path(&self) -> Option<&str> { self.export_path.as_deref() }
    pub fn get_report_path(&self) -> Option<&str> { self.report_path.as_deref() }
    pub fn get_add_spec(&self) -> Option<&str> { self.add_spec.as_deref() }
    pub fn get_refresh(&self) -> bool { self.refresh }
    pub fn get_clear_cache(&self) -> bool { self.clear_cache }
    pub fn get_offline(&self) -> bool { self.offline }
}
