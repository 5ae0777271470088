use crate::model::ScenarioError;
use crate::provider::mongo::MongoShell;
use crate::scenario::{Scenario, StepSink};
use async_trait::async_trait;

const COLLECTION: &str = "read_committed_demo";

pub(crate) const SCRIPT: &str = r#"
const dbx = db.getSiblingDB("txdemo");
const coll = dbx.read_committed_demo;

step({is_header: true, description: "💰 Read Committed Isolation Demonstration"});

const initial = coll.findOne({account: "checking"});
step({session: "Setup",
      description: "Initial state - checking account",
      query: 'db.read_committed_demo.findOne({account: "checking"})',
      result: "balance: $" + initial.balance});

const sessionA = db.getMongo().startSession();
sessionA.startTransaction({readConcern: {level: "majority"}, writeConcern: {w: "majority"}});
step({session: "Session A",
      description: "Starting transaction with majority read/write concern",
      query: "session.startTransaction({readConcern: 'majority', writeConcern: 'majority'})",
      result: "Transaction started"});

const collA = sessionA.getDatabase("txdemo").read_committed_demo;
collA.updateOne({account: "checking"}, {$inc: {balance: -500}});
step({session: "Session A",
      description: "Debiting $500 from checking account (within transaction)",
      query: 'db.read_committed_demo.updateOne({account: "checking"}, {$inc: {balance: -500}})',
      result: "Update applied (not committed)"});

sleep(500);

const readB = dbx.runCommand({find: "read_committed_demo", filter: {account: "checking"},
                              readConcern: {level: "majority"}}).cursor.firstBatch[0];
step({session: "Session B",
      description: "Reading account with readConcern: majority",
      query: 'db.read_committed_demo.find({account: "checking"}).readConcern("majority")',
      result: "balance: $" + readB.balance});

step({is_header: true,
      description: "✅ Session B sees only committed data (original $1000), not Session A's uncommitted -$500"});

sleep(500);
sessionA.commitTransaction();
step({session: "Session A",
      description: "Committing the transaction",
      query: "session.commitTransaction()",
      result: "Transaction committed successfully"});

sleep(500);
const after = coll.findOne({account: "checking"});
step({session: "Session B",
      description: "Reading account again after Session A committed",
      query: 'db.read_committed_demo.findOne({account: "checking"})',
      result: "balance: $" + after.balance});

step({is_header: true,
      description: "🎉 After commit, Session B observes the debited balance"});

sessionA.endSession();
"#;

/// Shows that other sessions keep reading the last committed value until a
/// concurrent transaction commits.
pub struct ReadCommittedScenario {
    shell: MongoShell,
}

impl ReadCommittedScenario {
    pub fn new(shell: MongoShell) -> Self {
        Self { shell }
    }
}

#[async_trait]
impl Scenario for ReadCommittedScenario {
    fn name(&self) -> &str {
        "Read Committed"
    }

    fn description(&self) -> &str {
        "Demonstrates read committed isolation with majority read concern.\n\
         \n\
         This scenario shows:\n\
         1. A checking account holds $1000\n\
         2. Session A starts a transaction and debits $500\n\
         3. Session B reads with readConcern: majority - sees ORIGINAL $1000\n\
         4. Session A commits\n\
         5. Session B reads again - now sees the UPDATED $500"
    }

    fn isolation_level(&self) -> &str {
        "Read Committed (majority)"
    }

    async fn setup(&self) -> Result<(), ScenarioError> {
        self.shell
            .eval(
                "db.read_committed_demo.drop(); \
                 db.read_committed_demo.insertOne({account: 'checking', balance: 1000, currency: 'USD'})",
            )
            .await
            .map(|_| ())
            .map_err(|e| ScenarioError::Setup(format!("{e:#}")))
    }

    async fn run(&self, sink: StepSink) -> Result<(), ScenarioError> {
        super::stream_script(&self.shell, SCRIPT, sink).await
    }

    async fn cleanup(&self) -> Result<(), ScenarioError> {
        super::drop_collection(&self.shell, COLLECTION)
            .await
            .map_err(ScenarioError::Cleanup)
    }
}
