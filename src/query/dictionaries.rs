use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;

lazy_static! {
    /// Frequent operator typos mapped to their corrections. Keyed and
    /// valued lowercase; the enhancer applies these at confidence 0.9.
    pub static ref TYPO_CORRECTIONS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("pasword", "password");
        m.insert("passwrd", "password");
        m.insert("passowrd", "password");
        m.insert("databse", "database");
        m.insert("datbase", "database");
        m.insert("servr", "server");
        m.insert("serer", "server");
        m.insert("swich", "switch");
        m.insert("swtich", "switch");
        m.insert("rooter", "router");
        m.insert("netwrok", "network");
        m.insert("netowrk", "network");
        m.insert("firewal", "firewall");
        m.insert("confg", "config");
        m.insert("configuraton", "configuration");
        m.insert("adress", "address");
        m.insert("addres", "address");
        m.insert("pritner", "printer");
        m.insert("prnter", "printer");
        m.insert("backp", "backup");
        m.insert("bakcup", "backup");
        m.insert("licence", "license");
        m.insert("lisense", "license");
        m.insert("certifcate", "certificate");
        m.insert("domian", "domain");
        m.insert("credentails", "credentials");
        m.insert("credentals", "credentials");
        m
    };
}

lazy_static! {
    /// Acronym expansions in priority order. The enhancer always takes
    /// the first expansion, so multi-meaning acronyms ("dc") resolve to
    /// whichever meaning is listed first.
    pub static ref ACRONYM_EXPANSIONS: HashMap<&'static str, Vec<&'static str>> = {
        let mut m = HashMap::new();
        m.insert("dc", vec!["domain controller", "data center"]);
        m.insert("ad", vec!["active directory"]);
        m.insert("vm", vec!["virtual machine"]);
        m.insert("db", vec!["database"]);
        m.insert("fw", vec!["firewall"]);
        m.insert("lb", vec!["load balancer"]);
        m.insert("vpn", vec!["virtual private network"]);
        m.insert("dns", vec!["domain name system"]);
        m.insert("dhcp", vec!["dynamic host configuration protocol"]);
        m.insert("nas", vec!["network attached storage"]);
        m.insert("san", vec!["storage area network"]);
        m.insert("ups", vec!["uninterruptible power supply"]);
        m.insert("os", vec!["operating system"]);
        m.insert("pw", vec!["password"]);
        m.insert("cfg", vec!["configuration"]);
        m.insert("k8s", vec!["kubernetes"]);
        m.insert("rdp", vec!["remote desktop protocol"]);
        m.insert("ssh", vec!["secure shell"]);
        m
    };
}

lazy_static! {
    /// Words the enhancer never second-guesses: query scaffolding and the
    /// core ops vocabulary. These always contribute confidence 1.0.
    pub static ref COMMON_WORDS: HashSet<&'static str> = {
        [
            "show", "get", "find", "list", "what", "where", "who", "when",
            "how", "why", "is", "are", "the", "a", "an", "for", "of", "on",
            "in", "to", "with", "and", "or", "all", "my", "me", "about",
            "password", "passwords", "server", "servers", "config",
            "configuration", "network", "database", "backup", "backups",
            "firewall", "router", "switch", "printer", "document",
            "documents", "contact", "contacts", "location", "locations",
            "organization", "organizations", "asset", "assets", "license",
            "licenses", "domain", "admin", "user", "users", "credentials",
            "status", "report", "history", "down", "error", "errors",
            "production", "prod", "staging", "dev",
        ]
        .into_iter()
        .collect()
    };
}

/// Lowercased typo correction, if the dictionary knows this token.
pub fn correct_typo(token: &str) -> Option<&'static str> {
    TYPO_CORRECTIONS.get(token.to_lowercase().as_str()).copied()
}

/// First-listed expansion for a known acronym.
pub fn expand_acronym(token: &str) -> Option<&'static str> {
    ACRONYM_EXPANSIONS
        .get(token.to_lowercase().as_str())
        .and_then(|expansions| expansions.first())
        .copied()
}

/// True when a token is part of the recognized query vocabulary.
pub fn is_common_word(token: &str) -> bool {
    COMMON_WORDS.contains(token.to_lowercase().as_str())
}
