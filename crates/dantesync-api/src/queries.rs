// GraphQL documents sent by the client.
//
// The subscription-only query selects the same rx fields as the full
// query and leaves out `txChannels`, which is the bulk of the payload
// on large domains.

/// Whether an operation reads or writes. Only queries are cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

/// A named GraphQL operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    pub kind: OperationKind,
    pub document: &'static str,
}

pub const DOMAINS: Operation = Operation {
    name: "Domains",
    kind: OperationKind::Query,
    document: r"query Domains {
  domains {
    id
    name
  }
}",
};

pub const DOMAIN: Operation = Operation {
    name: "Domain",
    kind: OperationKind::Query,
    document: r"query Domain($domainIDInput: ID!) {
  domain(id: $domainIDInput) {
    id
    name
    devices {
      id
      name
      rxChannels {
        id
        index
        name
        subscribedDevice
        subscribedChannel
        status
        summary
      }
      txChannels {
        id
        index
        name
      }
    }
  }
}",
};

pub const DOMAIN_SUBSCRIPTIONS: Operation = Operation {
    name: "DomainSubscriptions",
    kind: OperationKind::Query,
    document: r"query DomainSubscriptions($domainIDInput: ID!) {
  domain(id: $domainIDInput) {
    id
    name
    devices {
      id
      name
      rxChannels {
        id
        index
        name
        subscribedDevice
        subscribedChannel
        status
        summary
      }
    }
  }
}",
};

pub const SET_RX_CHANNEL_SUBSCRIPTIONS: Operation = Operation {
    name: "DeviceRxChannelsSubscriptionSet",
    kind: OperationKind::Mutation,
    document: r"mutation DeviceRxChannelsSubscriptionSet($input: DeviceRxChannelsSubscriptionSetInput!) {
  DeviceRxChannelsSubscriptionSet(input: $input) {
    ok
  }
}",
};
