//! End-to-end tests of the scan pipeline: enumeration, the real probe
//! executor and the orchestrator, wired to scripted network collaborators.

#[cfg(test)]
mod support;

#[cfg(test)]
mod discovery;

#[cfg(test)]
mod scan;
