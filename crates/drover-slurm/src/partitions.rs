//! Account and partition projections from `sacctmgr` and `scontrol`.

use drover_core::{AccountInfo, QueueInfo};

/// Parse `sacctmgr -nP show users withassoc format=account,cluster,qos`
/// output: one pipe-delimited association per line.
///
/// Rows repeat an account once per association; duplicates collapse into
/// the first occurrence.
pub fn parse_accounts(raw: &str) -> Vec<AccountInfo> {
    let mut accounts: Vec<AccountInfo> = Vec::new();

    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let mut fields = line.split('|');
        let Some(name) = fields.next().filter(|n| !n.is_empty()) else {
            continue;
        };
        let cluster = fields.next().filter(|c| !c.is_empty()).map(str::to_string);
        let qos: Vec<String> = fields
            .next()
            .unwrap_or("")
            .split(',')
            .filter(|q| !q.is_empty())
            .map(str::to_string)
            .collect();

        let duplicate = accounts
            .iter()
            .any(|a| a.name == name && a.cluster == cluster);
        if !duplicate {
            accounts.push(AccountInfo {
                qos,
                cluster,
                ..AccountInfo::new(name)
            });
        }
    }

    accounts
}

/// Parse `scontrol show partition --oneliner` output: one partition per
/// line, as space-separated `Key=Value` tokens.
///
/// `AllowAccounts=ALL` (or an absent AllowAccounts) means every account may
/// use the partition, which projects to an unset allow-list.
pub fn parse_partitions(raw: &str) -> Vec<QueueInfo> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(|line| {
            let mut queue: Option<QueueInfo> = None;
            let mut qos = Vec::new();
            let mut allow_accounts = None;
            let mut deny_accounts = Vec::new();

            for token in line.split_whitespace() {
                let Some((key, value)) = token.split_once('=') else {
                    continue;
                };
                match key {
                    "PartitionName" => queue = Some(QueueInfo::new(value)),
                    "QoS" | "AllowQos" if value != "N/A" && value != "ALL" => {
                        qos = csv(value);
                    }
                    "AllowAccounts" if value != "ALL" => {
                        allow_accounts = Some(csv(value));
                    }
                    "DenyAccounts" => deny_accounts = csv(value),
                    _ => {}
                }
            }

            queue.map(|q| QueueInfo {
                qos,
                allow_accounts,
                deny_accounts,
                ..q
            })
        })
        .collect()
}

fn csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accounts() {
        let raw = "\
pzs0714|owens|normal,hugemem
pzs0714|owens|normal,hugemem
pzs0715|pitzer|normal
";
        let accounts = parse_accounts(raw);
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].name, "pzs0714");
        assert_eq!(accounts[0].cluster.as_deref(), Some("owens"));
        assert_eq!(accounts[0].qos, vec!["normal", "hugemem"]);
        assert_eq!(accounts[1].name, "pzs0715");
    }

    #[test]
    fn test_parse_partitions() {
        let raw = "\
PartitionName=general AllowGroups=ALL AllowAccounts=ALL AllowQos=ALL Default=YES State=UP
PartitionName=hugemem AllowAccounts=pzs0714,pzs0715 DenyAccounts=guests QoS=hugemem State=UP
";
        let queues = parse_partitions(raw);
        assert_eq!(queues.len(), 2);

        let general = &queues[0];
        assert_eq!(general.name, "general");
        assert_eq!(general.allow_accounts, None);
        assert!(general.qos.is_empty());

        let hugemem = &queues[1];
        assert_eq!(hugemem.name, "hugemem");
        assert_eq!(
            hugemem.allow_accounts,
            Some(vec!["pzs0714".to_string(), "pzs0715".to_string()])
        );
        assert_eq!(hugemem.deny_accounts, vec!["guests"]);
        assert_eq!(hugemem.qos, vec!["hugemem"]);
    }

    #[test]
    fn test_partition_line_without_name_is_skipped() {
        assert!(parse_partitions("State=UP TotalCPUs=48\n").is_empty());
    }
}
