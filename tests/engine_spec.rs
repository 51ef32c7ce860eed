use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use scrumdeck::engine::{
    authorize_host, EngineError, EstimateSink, SessionRegistry, SinkError,
};
use scrumdeck::models::EstimationField;
use speculate2::speculate;
use uuid::Uuid;

/// Sink that records every write.
#[derive(Default)]
struct RecordingSink {
    writes: Mutex<Vec<(String, EstimationField, i64)>>,
}

impl EstimateSink for RecordingSink {
    fn write_field(
        &self,
        feature_id: &str,
        field: EstimationField,
        value: i64,
    ) -> Result<(), SinkError> {
        self.writes
            .lock()
            .unwrap()
            .push((feature_id.to_string(), field, value));
        Ok(())
    }
}

/// Sink that always reports the store as busy.
struct BusySink;

impl EstimateSink for BusySink {
    fn write_field(&self, _: &str, _: EstimationField, _: i64) -> Result<(), SinkError> {
        Err(SinkError::Conflict)
    }
}

speculate! {
    before {
        let registry = SessionRegistry::new();
        let session = registry.get_or_create("FTR-1", "Payments Modernization");
    }

    describe "registry" {
        it "derives the session id from the feature" {
            assert_eq!(session.id, "POKER-FTR-1");
            assert_eq!(session.feature_id, "FTR-1");
            assert_eq!(session.feature_name, "Payments Modernization");
        }

        it "returns the same session for repeated requests" {
            let again = registry.get_or_create("FTR-1", "Payments Modernization");
            assert!(Arc::ptr_eq(&session, &again));
        }

        it "finds sessions by id" {
            let found = registry.lookup("POKER-FTR-1").expect("session should exist");
            assert!(Arc::ptr_eq(&session, &found));
            assert!(registry.lookup("POKER-FTR-9").is_none());
        }

        it "keeps sessions for distinct features apart" {
            let other = registry.get_or_create("FTR-2", "Customer Analytics Platform");
            assert!(!Arc::ptr_eq(&session, &other));
        }
    }

    describe "joining" {
        it "makes the first joiner host" {
            let joined = session.join("alice");
            assert!(joined.is_host);
            assert_eq!(joined.host_name, "alice");
        }

        it "never reassigns the host" {
            session.join("alice");
            let joined = session.join("bob");
            assert!(!joined.is_host);
            assert_eq!(joined.host_name, "alice");
        }

        it "is idempotent" {
            session.join("alice");
            session.join("bob");
            let rejoined = session.join("alice");
            assert!(rejoined.is_host);

            let summary = session.summary();
            assert_eq!(summary.participants, vec!["alice", "bob"]);
            assert_eq!(summary.host_name.as_deref(), Some("alice"));
        }
    }

    describe "voting" {
        before {
            session.join("alice");
            session.join("bob");
        }

        it "records votes per field and participant" {
            session.vote("alice", EstimationField::BusinessValue, 8);
            session.vote("bob", EstimationField::BusinessValue, 13);
            session.vote("alice", EstimationField::JobSize, 5);

            let snapshot = session.snapshot("alice");
            let business = &snapshot.fields[&EstimationField::BusinessValue];
            assert_eq!(business.voted_users, vec!["alice", "bob"]);
            assert_eq!(business.your_value, Some(8));

            let job_size = &snapshot.fields[&EstimationField::JobSize];
            assert_eq!(job_size.voted_users, vec!["alice"]);
        }

        it "overwrites a participant's prior vote for the field" {
            session.vote("alice", EstimationField::JobSize, 3);
            session.vote("alice", EstimationField::JobSize, 8);

            session.reveal();
            let snapshot = session.snapshot("alice");
            assert_eq!(snapshot.consensus[&EstimationField::JobSize], Some(8));
        }

        it "hides a standing reveal, whichever field changes" {
            session.vote("alice", EstimationField::BusinessValue, 8);
            session.reveal();
            assert!(session.snapshot("alice").revealed);

            session.vote("bob", EstimationField::StoryPoints, 5);

            let snapshot = session.snapshot("alice");
            assert!(!snapshot.revealed);
            assert!(snapshot.consensus.is_empty());
        }

        it "hides a reveal even for a participant who already voted" {
            session.vote("alice", EstimationField::BusinessValue, 8);
            session.reveal();

            session.vote("alice", EstimationField::BusinessValue, 5);
            assert!(!session.snapshot("bob").revealed);
        }

        it "retains concurrent votes from distinct participants" {
            let voters: Vec<_> = [("alice", 8), ("bob", 13)]
                .into_iter()
                .map(|(name, value)| {
                    let session = session.clone();
                    thread::spawn(move || {
                        session.vote(name, EstimationField::BusinessValue, value)
                    })
                })
                .collect();
            for voter in voters {
                voter.join().unwrap();
            }

            session.reveal();
            let snapshot = session.snapshot("alice");
            let business = &snapshot.fields[&EstimationField::BusinessValue];
            assert_eq!(business.voted_users, vec!["alice", "bob"]);

            let values = business.values.clone().expect("revealed values");
            assert_eq!(values["alice"], 8);
            assert_eq!(values["bob"], 13);
        }
    }

    describe "blind voting" {
        before {
            session.join("alice");
            session.join("bob");
            session.vote("alice", EstimationField::BusinessValue, 8);
            session.vote("bob", EstimationField::BusinessValue, 13);
        }

        it "shows who voted but not their values before reveal" {
            let snapshot = session.snapshot("alice");
            let business = &snapshot.fields[&EstimationField::BusinessValue];

            assert_eq!(business.voted_users, vec!["alice", "bob"]);
            assert_eq!(business.your_value, Some(8));
            assert!(business.values.is_none());
            assert!(snapshot.consensus.is_empty());
        }

        it "shows each viewer their own value" {
            let for_bob = session.snapshot("bob");
            assert_eq!(
                for_bob.fields[&EstimationField::BusinessValue].your_value,
                Some(13)
            );
        }

        it "exposes raw values and consensus only while revealed" {
            session.reveal();
            let snapshot = session.snapshot("alice");

            let business = &snapshot.fields[&EstimationField::BusinessValue];
            let values = business.values.clone().expect("revealed values");
            assert_eq!(values["bob"], 13);
            // mean(8, 13) = 10.5, equidistant from 8 and 13: smaller wins
            assert_eq!(snapshot.consensus[&EstimationField::BusinessValue], Some(8));
        }
    }

    describe "reveal" {
        before {
            session.join("alice");
            session.join("bob");
            session.join("carol");
        }

        it "snaps the per-field mean onto the deck" {
            session.vote("alice", EstimationField::BusinessValue, 3);
            session.vote("bob", EstimationField::BusinessValue, 5);
            session.vote("carol", EstimationField::BusinessValue, 8);

            let consensus = session.reveal();
            // mean = 5.33, nearest deck element is 5
            assert_eq!(consensus[&EstimationField::BusinessValue], Some(5));
        }

        it "reports None for fields nobody voted on" {
            session.vote("alice", EstimationField::JobSize, 5);

            let consensus = session.reveal();
            assert_eq!(consensus[&EstimationField::JobSize], Some(5));
            assert_eq!(consensus[&EstimationField::StoryPoints], None);
            assert_eq!(consensus.len(), EstimationField::ALL.len());
        }
    }

    describe "host authority" {
        before {
            session.join("alice");
            session.join("bob");
        }

        it "authorizes the host" {
            let token = registry.register_claim(&session.id, "alice");

            let authorized = authorize_host(&registry, Some(token), &session.id)
                .expect("host should pass");
            assert!(Arc::ptr_eq(&session, &authorized));
        }

        it "rejects a guest" {
            let token = registry.register_claim(&session.id, "bob");

            let err = authorize_host(&registry, Some(token), &session.id).unwrap_err();
            assert!(matches!(err, EngineError::HostOnly));
        }

        it "rejects a missing token" {
            let err = authorize_host(&registry, None, &session.id).unwrap_err();
            assert!(matches!(err, EngineError::HostOnly));
        }

        it "rejects an unknown token" {
            let err = authorize_host(&registry, Some(Uuid::new_v4()), &session.id).unwrap_err();
            assert!(matches!(err, EngineError::HostOnly));
        }

        it "rejects a claim that belongs to another session" {
            let other = registry.get_or_create("FTR-2", "Customer Analytics Platform");
            other.join("alice");
            let foreign_token = registry.register_claim(&other.id, "alice");

            let err = authorize_host(&registry, Some(foreign_token), &session.id).unwrap_err();
            assert!(matches!(err, EngineError::HostOnly));
        }

        it "rejects host-only calls against a session that does not exist" {
            let token = registry.register_claim(&session.id, "alice");

            let err = authorize_host(&registry, Some(token), "POKER-MISSING").unwrap_err();
            assert!(matches!(err, EngineError::HostOnly));
        }
    }

    describe "commit" {
        before {
            session.join("alice");
            session.join("bob");
        }

        it "writes every non-null consensus field through the sink" {
            session.vote("alice", EstimationField::BusinessValue, 8);
            session.vote("bob", EstimationField::BusinessValue, 13);
            session.vote("alice", EstimationField::JobSize, 5);
            session.reveal();

            let sink = RecordingSink::default();
            let written = session.commit(&sink).expect("commit should succeed");
            assert_eq!(written, 2);

            let writes = sink.writes.lock().unwrap();
            assert_eq!(
                *writes,
                vec![
                    ("FTR-1".to_string(), EstimationField::BusinessValue, 8),
                    ("FTR-1".to_string(), EstimationField::JobSize, 5),
                ]
            );
        }

        it "writes nothing for a hidden session" {
            session.vote("alice", EstimationField::BusinessValue, 8);

            let sink = RecordingSink::default();
            let written = session.commit(&sink).expect("commit should succeed");
            assert_eq!(written, 0);
            assert!(sink.writes.lock().unwrap().is_empty());
        }

        it "keeps the consensus when the sink reports a conflict" {
            session.vote("alice", EstimationField::StoryPoints, 8);
            session.reveal();

            let err = session.commit(&BusySink).unwrap_err();
            assert!(matches!(err, SinkError::Conflict));

            // Session state is not rolled back; the host can retry.
            let snapshot = session.snapshot("alice");
            assert!(snapshot.revealed);
            assert_eq!(snapshot.consensus[&EstimationField::StoryPoints], Some(8));
        }
    }

    describe "idle eviction" {
        it "evicts only sessions idle at least the ttl" {
            assert_eq!(registry.evict_idle(Duration::from_secs(3600)), 0);
            assert!(registry.lookup(&session.id).is_some());

            assert_eq!(registry.evict_idle(Duration::ZERO), 1);
            assert!(registry.lookup(&session.id).is_none());
        }

        it "drops the claims of evicted sessions" {
            session.join("alice");
            let token = registry.register_claim(&session.id, "alice");

            registry.evict_idle(Duration::ZERO);
            assert!(registry.claim(token).is_none());
        }

        it "recreates a session cleanly after eviction" {
            session.join("alice");
            registry.evict_idle(Duration::ZERO);

            let fresh = registry.get_or_create("FTR-1", "Payments Modernization");
            assert!(!Arc::ptr_eq(&session, &fresh));
            assert!(fresh.summary().participants.is_empty());
        }
    }
}
