use volley_common::probe::ProbeOutcome;

/// Keeps only outcomes that got a reply and are marked successful.
///
/// Order is preserved and running it twice changes nothing.
pub fn eliminate_false_positives(outcomes: Vec<ProbeOutcome>) -> Vec<ProbeOutcome> {
    outcomes
        .into_iter()
        .filter(|outcome| outcome.received_summary.is_some() && outcome.success)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use volley_common::probe::{OsGuess, PortState, ProbeEvidence, ProbeResponse};

    const ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5));

    fn answered(name: &str) -> ProbeOutcome {
        let evidence = ProbeEvidence {
            sent_summary: "IP / ICMP".into(),
            response: Some(ProbeResponse {
                summary: "IP / ICMP echo-reply".into(),
                ttl: Some(64),
                carries_tcp: false,
            }),
            port_state: PortState::Closed,
            os_guess: OsGuess::Unknown,
            domain_name: None,
        };
        ProbeOutcome::new(name, ADDR, 80, evidence)
    }

    fn silent(name: &str) -> ProbeOutcome {
        ProbeOutcome::unanswered(name, ADDR, 80, "IP / TCP".into())
    }

    #[test]
    fn drops_unanswered_and_keeps_order() {
        let outcomes = vec![answered("A"), silent("B"), answered("C"), silent("D")];
        let kept: Vec<String> = eliminate_false_positives(outcomes)
            .into_iter()
            .map(|outcome| outcome.plugin_name)
            .collect();
        assert_eq!(kept, vec!["A", "C"]);
    }

    #[test]
    fn inconsistent_records_are_dropped() {
        let mut forged = answered("A");
        forged.success = false;
        let mut hollow = silent("B");
        hollow.success = true;
        assert!(eliminate_false_positives(vec![forged, hollow]).is_empty());
    }

    #[test]
    fn filtering_is_idempotent() {
        let outcomes = vec![silent("A"), answered("B"), answered("C"), silent("D")];
        let once = eliminate_false_positives(outcomes);
        let twice = eliminate_false_positives(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_in_empty_out() {
        assert!(eliminate_false_positives(Vec::new()).is_empty());
    }
}
